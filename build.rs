fn main() {
    // Network credentials are baked in at build time (see `config::NetworkConfig`).
    for var in [
        "NEST_WIFI_SSID",
        "NEST_WIFI_PASSWORD",
        "NEST_BROKER_URL",
        "NEST_ACCESS_TOKEN",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
