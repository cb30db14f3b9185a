use std::time::Duration;
use uuid::Uuid;

/**
 * How long a scan may run before giving up on finding the sensor.
 */
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(15);

/**
 * The maximum number of readings kept in the history. The oldest reading is evicted first.
 */
pub const HISTORY_CAPACITY: usize = 100;

/**
 * Notification payloads carry a little-endian IEEE-754 f32 in their first bytes.
 */
pub const PACKET_LEN: usize = 4;

/**
 * The local name the ESP32 firmware advertises.
 */
pub const EXPECTED_DEVICE_NAME: &str = "ESP32_Pressure";

/**
 * The UUID of the Bluetooth BLE service exposed by the pressure sensor firmware.
 */
pub const PRESSURE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000181a_0000_1000_8000_00805f9b34fb);

/**
 * The UUID of the notifying characteristic carrying pressure values.
 */
pub const PRESSURE_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef0);

/**
 * Client Characteristic Configuration Descriptor, written to enable notifications.
 */
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);
