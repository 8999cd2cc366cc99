//! Compiles the ingest gRPC contract at build time.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/ingest.proto");
    // SAFETY: the only writer of PROTOC in this build script's single-threaded process.
    #[allow(unsafe_code, reason = "single-threaded build script setting PROTOC before use")]
    unsafe {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::configure().compile(&["proto/ingest.proto"], &["proto"])?;
    Ok(())
}
