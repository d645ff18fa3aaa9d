/// Topology record of a single atom.
///
/// Coordinates are not stored here; they live in the frames of the owning
/// molecule so that one topology can be paired with any number of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OH2", "H1").
    pub name: String,
    /// The name of the parent residue (e.g., "TIP3", "ALA").
    pub resname: String,
    /// The residue number as written in the input file.
    pub resid: isize,
}

impl Atom {
    pub fn new(name: &str, resname: &str, resid: isize) -> Self {
        Self {
            name: name.to_string(),
            resname: resname.to_string(),
            resid,
        }
    }

    /// Returns `true` for atoms whose name marks them as hydrogens.
    ///
    /// Follows the naming rule of the common MD packages: the atom name starts
    /// with `H`, optionally preceded by a digit (`1HB`, `2HG1`). Element
    /// symbols as written in XYZ files are also understood, so `D` counts as
    /// hydrogen while `He`, `Hf`, `Hg`, `Ho` and `Hs` do not.
    pub fn is_hydrogen(&self) -> bool {
        let trimmed = self.name.trim_start_matches(|c: char| c.is_ascii_digit());
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some('H' | 'D'), None) => true,
            (Some('H'), Some(next)) => !next.is_ascii_lowercase(),
            _ => false,
        }
    }
}
