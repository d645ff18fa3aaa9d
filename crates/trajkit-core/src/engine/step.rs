use super::host::{FrameStore, HostError, Molecule};

/// Analysis cursor handed to every callback.
///
/// `frame` counts analyzed frames across all files and chunks; `chunk_frame`
/// is the index of the current frame inside the host's resident chunk.
pub struct Step<'m> {
    molecule: &'m mut dyn Molecule,
    frame: Option<usize>,
    chunk_frame: Option<usize>,
}

impl<'m> Step<'m> {
    pub(crate) fn new(molecule: &'m mut dyn Molecule) -> Self {
        Self {
            molecule,
            frame: None,
            chunk_frame: None,
        }
    }

    /// Builds a cursor positioned on an already-resident frame.
    pub fn at(molecule: &'m mut dyn Molecule, frame: usize, chunk_frame: usize) -> Self {
        Self {
            molecule,
            frame: Some(frame),
            chunk_frame: Some(chunk_frame),
        }
    }

    /// Global index of the current frame.
    pub fn frame(&self) -> usize {
        self.frame.unwrap_or_default()
    }

    /// Index of the current frame inside the host.
    pub fn chunk_frame(&self) -> usize {
        self.chunk_frame.unwrap_or_default()
    }

    /// Number of frames analyzed so far, including the current one.
    pub fn processed(&self) -> usize {
        self.frame.map_or(0, |frame| frame + 1)
    }

    pub fn molecule(&self) -> &dyn Molecule {
        &*self.molecule
    }

    pub fn molecule_mut(&mut self) -> &mut dyn Molecule {
        &mut *self.molecule
    }

    pub(crate) fn next_chunk(&mut self) {
        self.chunk_frame = None;
    }

    /// Advances both counters and points the host at the new frame.
    pub(crate) fn next_frame(&mut self) -> Result<(), HostError> {
        let chunk_frame = self.chunk_frame.map_or(0, |f| f + 1);
        self.molecule.set_active_frame(chunk_frame)?;
        self.chunk_frame = Some(chunk_frame);
        self.frame = Some(self.frame.map_or(0, |f| f + 1));
        Ok(())
    }
}
