// build.rs

fn main() {
    // Packagers pick the built-in module directory at build time by
    // exporting VDPAU_MODULEDIR; the source falls back to /usr/lib/vdpau
    // when it is absent.
    println!("cargo:rerun-if-env-changed=VDPAU_MODULEDIR");
    if let Ok(dir) = std::env::var("VDPAU_MODULEDIR") {
        println!("cargo:rustc-env=VDPAU_MODULEDIR={dir}");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
