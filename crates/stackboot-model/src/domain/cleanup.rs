/// Operator-selected cleanup steps, each run before its reconciliation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupFlags {
    /// Empty and delete the metadata container before re-creating it.
    pub container: bool,
    /// Delete catalog images whose names match the desired specs.
    pub images: bool,
    /// Remove the orchestration tool's cached environment state.
    pub environment: bool,
}

impl CleanupFlags {
    pub fn all() -> Self {
        Self {
            container: true,
            images: true,
            environment: true,
        }
    }

    /// `all` overrides the individual flags.
    pub fn from_flags(container: bool, images: bool, environment: bool, all: bool) -> Self {
        if all {
            return Self::all();
        }
        Self {
            container,
            images,
            environment,
        }
    }

    pub fn any(&self) -> bool {
        self.container || self.images || self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_implies_every_flag() {
        let flags = CleanupFlags::from_flags(false, false, false, true);
        assert_eq!(flags, CleanupFlags::all());
        assert!(flags.any());
    }

    #[test]
    fn individual_flags_pass_through() {
        let flags = CleanupFlags::from_flags(true, false, true, false);
        assert!(flags.container);
        assert!(!flags.images);
        assert!(flags.environment);
        assert!(!CleanupFlags::default().any());
    }
}
