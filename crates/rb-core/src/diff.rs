//! Common prefix/suffix split between two codepoint sequences.

use crate::message::Splice;

/// Lengths of the shared leading and trailing runs of two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonRuns {
    pub prefix: usize,
    /// Measured over what remains after the prefix, so a character is never
    /// counted in both runs.
    pub suffix: usize,
}

fn leading_run<T: PartialEq>(a: impl Iterator<Item = T>, b: impl Iterator<Item = T>) -> usize {
    a.zip(b).take_while(|(x, y)| x == y).count()
}

pub fn common_runs<T: PartialEq>(old: &[T], new: &[T]) -> CommonRuns {
    let prefix = leading_run(old.iter(), new.iter());
    let suffix = leading_run(old[prefix..].iter().rev(), new[prefix..].iter().rev());
    CommonRuns { prefix, suffix }
}

/// The splice that turns `old` into `new`.
pub fn splice_between(old: &[char], new: &[char]) -> Splice {
    let CommonRuns { prefix, suffix } = common_runs(old, new);
    Splice {
        start: prefix,
        len: old.len() - suffix - prefix,
        text: new[prefix..new.len() - suffix].iter().collect(),
    }
}
