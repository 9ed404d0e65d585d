fn main() {
    use vergen::{BuildBuilder, Emitter};

    // Build metadata for `--version`; failures are non-fatal and the binary
    // falls back to the bare crate version.
    let mut emitter = Emitter::default();
    if let Ok(build) = BuildBuilder::all_build() {
        let _ = emitter.add_instructions(&build);
    }
    if let Err(err) = emitter.emit() {
        println!("cargo:warning=build metadata unavailable: {err}");
    }
}
