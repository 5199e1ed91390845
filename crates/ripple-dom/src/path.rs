#![forbid(unsafe_code)]

//! Structural paths addressing nodes within one component's tree.
//!
//! A path is the sequence of child indices from the component root. The
//! empty path is the root itself. Paths in a patch script address positions
//! in the tree *as it stands when that patch applies*, which is why the diff
//! engine orders its output the way it does (see `diff`).

use std::fmt;

use smallvec::SmallVec;

/// Child-index path from a component root. Short paths stay inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(SmallVec<[u32; 8]>);

impl NodePath {
    /// The component root.
    #[must_use]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of the `index`-th child of `self`.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut next = self.0.clone();
        next.push(index);
        Self(next)
    }

    /// Parent path, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        let mut up = self.0.clone();
        up.pop();
        Some(Self(up))
    }

    /// Last segment (index within the parent), or `None` at the root.
    #[must_use]
    pub fn leaf_index(&self) -> Option<u32> {
        self.0.last().copied()
    }

    pub fn segments(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        self.0.to_vec()
    }
}

impl From<&[u32]> for NodePath {
    fn from(segments: &[u32]) -> Self {
        Self(SmallVec::from_slice(segments))
    }
}

impl<const N: usize> From<[u32; N]> for NodePath {
    fn from(segments: [u32; N]) -> Self {
        Self(SmallVec::from_slice(&segments))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NodePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for NodePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let segments = Vec::<u32>::deserialize(deserializer)?;
        Ok(Self(SmallVec::from_vec(segments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_children() {
        let root = NodePath::root();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);

        let child = root.child(2).child(0);
        assert_eq!(child.depth(), 2);
        assert_eq!(child.leaf_index(), Some(0));
        assert_eq!(child.parent(), Some(root.child(2)));
    }

    #[test]
    fn display_is_slash_joined() {
        assert_eq!(NodePath::root().to_string(), "/");
        assert_eq!(NodePath::from([1, 0, 3]).to_string(), "/1/0/3");
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(NodePath::from([0]) < NodePath::from([0, 1]));
        assert!(NodePath::from([0, 2]) < NodePath::from([1]));
    }
}
