use std::fmt;

/// A satisfying word: per atomic proposition, the intervals it holds on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    length: usize,
    propositions: Vec<(String, Vec<(usize, usize)>)>,
}

impl Certificate {
    /// `propositions` must be in name order; intervals are sorted here.
    pub(crate) fn new(length: usize, propositions: Vec<(String, Vec<(usize, usize)>)>) -> Self {
        let propositions = propositions
            .into_iter()
            .map(|(name, mut intervals)| {
                intervals.sort_unstable();
                (name, intervals)
            })
            .collect();
        Certificate { length, propositions }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn propositions(&self) -> impl Iterator<Item = (&str, &[(usize, usize)])> + '_ {
        self.propositions
            .iter()
            .map(|(name, intervals)| (name.as_str(), intervals.as_slice()))
    }

    pub fn intervals(&self, proposition: &str) -> Option<&[(usize, usize)]> {
        self.propositions()
            .find(|(name, _)| *name == proposition)
            .map(|(_, intervals)| intervals)
    }

    pub fn holds(&self, proposition: &str, from: usize, to: usize) -> bool {
        self.intervals(proposition)
            .is_some_and(|intervals| intervals.contains(&(from, to)))
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, intervals) in self.propositions() {
            writeln!(f, "AP: {name}")?;
            for (from, to) in intervals {
                write!(f, "({from},{to}) ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_block_per_proposition() {
        let certificate = Certificate::new(
            2,
            vec![
                ("p".to_owned(), vec![(1, 1), (0, 1)]),
                ("q".to_owned(), vec![]),
            ],
        );
        assert_eq!(certificate.to_string(), "AP: p\n(0,1) (1,1) \nAP: q\n\n");
        assert!(certificate.holds("p", 0, 1));
        assert!(!certificate.holds("q", 0, 0));
        assert_eq!(certificate.intervals("r"), None);
    }
}
