use tokio::task::JoinHandle;

/// Owned handle of one recurring background task.
///
/// Arming always aborts whatever the slot held before, so a slot can never
/// leak a second live task. Disarming an empty slot is a no-op.
#[derive(Debug, Default)]
pub struct DriverSlot {
    handle: Option<JoinHandle<()>>,
}

impl DriverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, handle: JoinHandle<()>) {
        self.disarm();
        self.handle = Some(handle);
    }

    /// Abort the held task. Returns whether a task was held.
    pub fn disarm(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// A task is held and has not run to completion.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DriverSlot {
    fn drop(&mut self) {
        self.disarm();
    }
}
