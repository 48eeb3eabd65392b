/// Decides whether a declared identifier is exported.
///
/// The line classifier asks this for every declaration it counts, so swapping
/// the implementation is enough to retarget visibility rules.
pub trait Visibility: Send + Sync {
    fn is_public(&self, ident: &str) -> bool;
}

/// Exported iff the identifier starts with an upper-case letter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseVisibility;

impl Visibility for CaseVisibility {
    fn is_public(&self, ident: &str) -> bool {
        ident.chars().next().is_some_and(char::is_uppercase)
    }
}
