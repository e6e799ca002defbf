fn main() {
    // Compile-time fallbacks for an unprovisioned device, see `ClockConfig::with_build_defaults`
    for var in ["CLOCK_WIFI_SSID", "CLOCK_WIFI_PASSWORD", "CLOCK_MQTT_HOST"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Only run embuild when targeting ESP-IDF
    if std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "espidf") {
        embuild::espidf::sysenv::output();
    }
}
