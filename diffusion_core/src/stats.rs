/// Statistics produced by a single training epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochStats {
    epoch: usize,
    loss: f32,
    learning_rate: f32,
    samples: usize,
}

impl EpochStats {
    /// Creates a new `EpochStats`.
    ///
    /// # Args
    /// * `epoch` - Zero based index of the epoch.
    /// * `loss` - The epoch loss, averaged the way the strategy defines.
    /// * `learning_rate` - The learning rate used for the epoch's updates.
    /// * `samples` - Total number of samples processed during the epoch.
    ///
    /// # Returns
    /// An `EpochStats` instance containing the provided values.
    pub fn new(epoch: usize, loss: f32, learning_rate: f32, samples: usize) -> Self {
        Self {
            epoch,
            loss,
            learning_rate,
            samples,
        }
    }

    /// Returns the zero based index of the epoch.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Returns the epoch loss.
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Returns the learning rate used during the epoch.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns the number of samples processed in the epoch.
    pub fn samples(&self) -> usize {
        self.samples
    }
}
