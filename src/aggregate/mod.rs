pub mod structured;
pub mod text;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;

    use crate::job::{CancellationToken, ProgressSink};

    pub fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().expect("fixture has parent")).expect("create fixture dir");
        fs::write(path, contents).expect("write fixture");
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub reports: Mutex<Vec<i32>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl RecordingSink {
        pub fn cancelling_after(reports: usize, token: CancellationToken) -> Self {
            Self {
                reports: Mutex::new(Vec::new()),
                cancel_after: Some((reports, token)),
            }
        }

        pub fn snapshot(&self) -> Vec<i32> {
            self.reports.lock().expect("sink lock").clone()
        }
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, percent: i32) {
            let mut reports = self.reports.lock().expect("sink lock");
            reports.push(percent);
            if let Some((limit, token)) = &self.cancel_after {
                if reports.len() >= *limit {
                    token.cancel();
                }
            }
        }
    }
}
