use crate::Energy;
use crate::Probability;
use crate::Result;
use ndarray::Array2;
use ndarray::Array3;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// One evaluation checkpoint of a training run, serialized as JSON.
///
/// Snapshots are self-contained: the particle state travels with the scalar
/// readouts so a run can be analyzed offline without replaying it.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub iteration: usize,
    pub loss: Energy,
    pub absolute_distance: Energy,
    pub relative_distance: Energy,
    pub particles: Array3<f32>,
    pub weights: Array2<Probability>,
}

impl Snapshot {
    /// Write the snapshot under `directory` as `iter_NNNNNN.json`.
    pub fn save(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(format!("iter_{:06}.json", self.iteration));
        serde_json::to_writer(File::create(path)?, self)?;
        Ok(())
    }
}
