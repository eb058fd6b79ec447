/// Visibility of the coordinate-line overlay drawn on the globe.
///
/// `force_hidden` wins over `visible`; it is set while interaction is
/// disabled and until the model has finished loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinateOverlay {
    /// User preference.
    pub visible: bool,
    /// Temporary override that hides the overlay regardless of preference.
    pub force_hidden: bool,
}

impl Default for CoordinateOverlay {
    fn default() -> Self {
        Self {
            visible: false,
            force_hidden: true,
        }
    }
}

impl CoordinateOverlay {
    /// Whether the overlay is drawn.
    pub fn is_shown(&self) -> bool {
        self.visible && !self.force_hidden
    }
}
