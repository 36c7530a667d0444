use std::fmt;

/// Workflow progress; stages only ever advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    CleanRequested,
    ImagesReconciled,
    ContainerPrepared,
    MetadataPublished,
    ConfigWritten,
    MetadataValidated,
    BootstrapInvoked,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CleanRequested => "clean-requested",
            Stage::ImagesReconciled => "images-reconciled",
            Stage::ContainerPrepared => "container-prepared",
            Stage::MetadataPublished => "metadata-published",
            Stage::ConfigWritten => "config-written",
            Stage::MetadataValidated => "metadata-validated",
            Stage::BootstrapInvoked => "bootstrap-invoked",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::CleanRequested < Stage::ImagesReconciled);
        assert!(Stage::ConfigWritten < Stage::MetadataValidated);
        assert!(Stage::MetadataValidated < Stage::BootstrapInvoked);
        assert_eq!(Stage::MetadataPublished.to_string(), "metadata-published");
    }
}
