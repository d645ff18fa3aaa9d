#[derive(Debug, Clone)]
pub enum Progress {
    FileStart { path: String },
    ChunkLoaded { frames: usize },
    FrameAnalyzed { frame: usize },
    FileFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn silent_reporter_ignores_events() {
        ProgressReporter::new().report(Progress::FileFinish);
    }

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::FrameAnalyzed { frame } = event {
                seen.lock().unwrap().push(frame);
            }
        }));
        reporter.report(Progress::FrameAnalyzed { frame: 0 });
        reporter.report(Progress::ChunkLoaded { frames: 3 });
        reporter.report(Progress::FrameAnalyzed { frame: 1 });
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec![0, 1]);
    }
}
