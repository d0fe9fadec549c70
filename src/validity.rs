use std::fmt;

/// Three-valued validity of a databag, or of any collection of databags.
///
/// Variants are ordered from worst to best, so the worst case of a
/// collection is simply its minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Validity {
    /// Present data violates the schema.
    Invalid,
    /// The schema requires fields which are not (yet) there.
    Incomplete,
    /// Present data conforms, or there is no schema.
    Valid,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
    pub fn is_invalid(self) -> bool {
        self == Validity::Invalid
    }
    pub fn is_incomplete(self) -> bool {
        self == Validity::Incomplete
    }
    pub fn as_bool(self) -> Option<bool> {
        self.into()
    }
}

impl From<Validity> for Option<bool> {
    fn from(v: Validity) -> Option<bool> {
        match v {
            Validity::Valid => Some(true),
            Validity::Incomplete => None,
            Validity::Invalid => Some(false),
        }
    }
}

impl From<Option<bool>> for Validity {
    fn from(v: Option<bool>) -> Validity {
        match v {
            Some(true) => Validity::Valid,
            None => Validity::Incomplete,
            Some(false) => Validity::Invalid,
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Validity::Valid => write!(f, "valid"),
            Validity::Incomplete => write!(f, "unfilled"),
            Validity::Invalid => write!(f, "invalid"),
        }
    }
}

/// Worst of (from bad to worse) valid, incomplete, invalid.
///
/// An empty input is `Valid`; call sites that want a different reading of
/// "nothing there" check for emptiness themselves.
pub fn worst_case<I: IntoIterator<Item = Validity>>(validity: I) -> Validity {
    let mut out = Validity::Valid;
    for value in validity {
        if value < out {
            out = value;
        }
    }
    out
}
