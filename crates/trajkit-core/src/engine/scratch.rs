use super::error::AnalysisError;
use super::host::{FrameStore, Molecule};
use tracing::warn;

/// Runs `action` on a temporary copy of `frame` and always removes the copy.
///
/// The action receives the molecule and the index of the copy, and may modify
/// the copy freely. Afterwards the copy is deleted and the active frame is
/// restored, whether or not the action succeeded, so the frame count and the
/// active frame are the same as before the call.
pub(crate) fn with_scratch_frame<F, R>(
    molecule: &mut dyn Molecule,
    frame: usize,
    action: F,
) -> Result<R, AnalysisError>
where
    F: FnOnce(&mut dyn Molecule, usize) -> Result<R, AnalysisError>,
{
    // 1. Record the cursor and create the copy.
    let original_active = molecule.active_frame();
    let scratch = molecule.duplicate_frame(frame)?;

    // 2. Execute the action.
    let result = action(&mut *molecule, scratch);

    // 3. Drop the copy and put the cursor back, even if the action failed.
    let cleanup = molecule.delete_frames(scratch..scratch + 1).and_then(|()| {
        match original_active {
            Some(active) => molecule.set_active_frame(active),
            None => Ok(()),
        }
    });

    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_error)) => Err(cleanup_error.into()),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup_error)) => {
            warn!(
                "Failed to release scratch frame {} after an error: {}",
                scratch, cleanup_error
            );
            Err(error)
        }
    }
}
