fn main() {
    // The webview shell is optional; the telemetry core builds without it.
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
