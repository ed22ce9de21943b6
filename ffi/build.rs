fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("DISPATCH_FFI_H".to_string()),
        ..Default::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            let _ = std::fs::create_dir_all(format!("{crate_dir}/include"));
            bindings.write_to_file(format!("{crate_dir}/include/dispatch_ffi.h"));
        }
        Err(err) => println!("cargo:warning=header not generated: {err}"),
    }
}
