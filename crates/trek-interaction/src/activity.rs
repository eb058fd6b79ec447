/// Interaction mode of a terrain controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Grab, rotate and navigate.
    #[default]
    Default,
    /// Picking a bounding box.
    BoundingBoxSelection,
    /// Measuring distance along a path.
    Distance,
    /// Picking endpoints of a height profile.
    HeightProfile,
    /// Sun angle tool.
    SunAngle,
    /// All terrain interaction off.
    Disabled,
}

impl Activity {
    /// Activities that own an in-progress selection.
    pub fn is_selection(self) -> bool {
        matches!(
            self,
            Activity::BoundingBoxSelection
                | Activity::Distance
                | Activity::HeightProfile
                | Activity::SunAngle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_activities() {
        assert!(Activity::Distance.is_selection());
        assert!(Activity::SunAngle.is_selection());
        assert!(!Activity::Default.is_selection());
        assert!(!Activity::Disabled.is_selection());
        assert_eq!(Activity::default(), Activity::Default);
    }
}
