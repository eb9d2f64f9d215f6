/// Progress message sent from the processor to whoever is watching the scan
#[derive(Debug, Clone, Default)]
pub struct ScanStatus {
    pub progress: f32,
    pub run_number: i32,
    pub runs_done: usize,
    pub runs_total: usize,
}

impl ScanStatus {
    pub fn new(run_number: i32, runs_done: usize, runs_total: usize) -> Self {
        let progress = if runs_total == 0 {
            1.0
        } else {
            runs_done as f32 / runs_total as f32
        };
        Self {
            progress,
            run_number,
            runs_done,
            runs_total,
        }
    }
}
