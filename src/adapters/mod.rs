//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                   |
//! |------------|-----------------|-------------------------------|
//! | `hardware` | TagReaderPort   | MFRC522 over SPI              |
//! |            | ClimatePort     | DHT22 single-wire             |
//! |            | LoadCellPort    | HX711 bit-banged              |
//! |            | ActuatorPort    | LEDC PWM (servo, RGB LED)     |
//! | `mqtt`     | ChannelPort     | ESP-IDF MQTT client (TLS)     |
//! | `nvs`      | ConfigPort      | NVS JSON blob                 |
//! | `wifi`     | LinkPort        | ESP-IDF WiFi STA              |

pub mod hardware;
pub mod mqtt;
pub mod nvs;
pub mod wifi;
