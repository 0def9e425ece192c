/// Collects background job starters and launches them together. Each job
/// ticks sequentially inside its own task, so a job can never overlap with
/// itself.
pub struct TaskRunner {
    starters: Vec<Box<dyn FnOnce() + Send>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        TaskRunner {
            starters: Vec::new(),
        }
    }

    pub fn add_task<F>(&mut self, start: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.starters.push(Box::new(start));
    }

    pub fn start_all(self) {
        for start in self.starters {
            start();
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}
