use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Global metrics instance
pub static METRICS: Lazy<Mutex<Metrics>> = Lazy::new(|| Mutex::new(Metrics::new()));

/// Batch run metrics tracker
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_files_attempted: u64,
    pub total_files_successful: u64,
    pub total_files_failed: u64,
    pub total_rows_read: u64,
    pub total_rows_malformed: u64,
    pub total_rows_admitted: u64,
    pub total_rows_dropped: u64,
    /// Accumulated per phase across files.
    pub processing_times: BTreeMap<String, Duration>,
    pub start_time: Option<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_file_attempt(&mut self) {
        self.total_files_attempted += 1;
    }

    pub fn record_file_success(&mut self, rows_read: u64, malformed: u64) {
        self.total_files_successful += 1;
        self.total_rows_read += rows_read;
        self.total_rows_malformed += malformed;
    }

    pub fn record_file_failure(&mut self) {
        self.total_files_failed += 1;
    }

    pub fn record_admission(&mut self, admitted: u64, dropped: u64) {
        self.total_rows_admitted += admitted;
        self.total_rows_dropped += dropped;
    }

    pub fn record_processing_time(&mut self, operation: String, duration: Duration) {
        *self.processing_times.entry(operation).or_default() += duration;
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn get_throughput(&self) -> f64 {
        let duration_secs = self.get_total_duration().as_secs_f64();
        if duration_secs > 0.0 {
            self.total_rows_read as f64 / duration_secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let duration = self.get_total_duration();
        println!("\n========== Survey Metrics Summary ==========");
        println!("Total Duration: {:.2?}", duration);
        println!("Files Attempted: {}", self.total_files_attempted);
        println!("Files Successful: {}", self.total_files_successful);
        println!("Files Failed: {}", self.total_files_failed);
        println!("Rows Read: {}", self.total_rows_read);
        println!("Rows Malformed: {}", self.total_rows_malformed);
        println!("Rows Admitted: {}", self.total_rows_admitted);
        println!("Rows Dropped: {}", self.total_rows_dropped);
        println!("Throughput: {:.2} rows/sec", self.get_throughput());

        if !self.processing_times.is_empty() {
            println!("\nProcessing Times:");
            for (op, duration) in &self.processing_times {
                println!("  {}: {:.2?}", op, duration);
            }
        }
        println!("============================================\n");
    }
}

/// Helper macro to time an operation
#[macro_export]
macro_rules! time_operation {
    ($name:expr, $op:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();
        $crate::metrics::METRICS
            .lock()
            .record_processing_time($name.to_string(), duration);
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut metrics = Metrics::new();
        metrics.record_file_attempt();
        metrics.record_file_success(10, 1);
        metrics.record_admission(8, 2);
        metrics.record_file_attempt();
        metrics.record_file_failure();

        assert_eq!(metrics.total_files_attempted, 2);
        assert_eq!(metrics.total_files_successful, 1);
        assert_eq!(metrics.total_files_failed, 1);
        assert_eq!(metrics.total_rows_read, 10);
        assert_eq!(metrics.total_rows_admitted + metrics.total_rows_dropped, 10);
    }

    #[test]
    fn test_processing_times_add_up() {
        let mut metrics = Metrics::default();
        metrics.record_processing_time("normalize".into(), Duration::from_millis(5));
        metrics.record_processing_time("normalize".into(), Duration::from_millis(7));
        assert_eq!(metrics.processing_times["normalize"], Duration::from_millis(12));
        assert_eq!(metrics.get_throughput(), 0.0);
    }

    #[test]
    fn test_time_operation_returns_value() {
        let value = crate::time_operation!("unit_test_op", 21 * 2);
        assert_eq!(value, 42);
        assert!(METRICS.lock().processing_times.contains_key("unit_test_op"));
    }
}
