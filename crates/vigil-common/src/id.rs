use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Initialize the snowflake ID generator.
///
/// `machine_id` and `node_id` identify this process instance (0-31 each).
/// Call once at startup; [`next_id`] falls back to (1, 1) when uninitialized.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = GENERATOR.lock().unwrap();
    *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Generate a snowflake ID as a string.
pub fn next_id() -> String {
    let mut gen = GENERATOR.lock().unwrap();
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}
