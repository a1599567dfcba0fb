use std::collections::BTreeSet;

use crate::{
    exception::{FileRequestException, FileRequestResult},
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
};

/// Policy choosing the destination storage locations of one file.
///
/// Implementations are pure: the same file and locations always give the same
/// destinations, and nothing shared is mutated.
pub trait AllocationStrategy: Send + Sync {
    /// Identifier the strategy is registered under.
    fn id(&self) -> &str;

    /// Destinations chosen by the policy alone.
    ///
    /// `locations` are the enabled locations, sorted by priority.
    fn select(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>>;

    /// Destinations of `file`, never empty, always retrievable online when
    /// the file requires it.
    fn allocate(
        &self,
        file: &FileToAllocate,
        locations: &[StorageLocation],
    ) -> FileRequestResult<BTreeSet<StorageTarget>> {
        let targets = self.select(file, locations)?;
        if targets.is_empty() {
            return Err(FileRequestException::NoStorageResolved {
                checksum: file.checksum.to_owned(),
                reason: format!("strategy <{}> selected nothing", self.id()),
            });
        }
        ensure_online(file, targets, locations)
    }
}

/// Append the best online location when `file` must be retrievable online and
/// none of `targets` is.
pub fn ensure_online(
    file: &FileToAllocate,
    mut targets: BTreeSet<StorageTarget>,
    locations: &[StorageLocation],
) -> FileRequestResult<BTreeSet<StorageTarget>> {
    if !file.online_mandatory && !file.quicklook {
        return Ok(targets);
    }
    let online_chosen = targets
        .iter()
        .any(|t| locations.iter().any(|l| l.id == t.storage && l.online));
    if online_chosen {
        return Ok(targets);
    }
    let online = locations
        .iter()
        .filter(|l| l.enabled && l.online)
        .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)))
        .ok_or_else(|| FileRequestException::OnlineUnsatisfiable {
            checksum: file.checksum.to_owned(),
        })?;
    targets.insert(StorageTarget::new(&online.id));
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<StorageLocation> {
        vec![
            StorageLocation::new("tape", 0, false),
            StorageLocation::new("disk-b", 2, true),
            StorageLocation::new("disk-a", 1, true),
        ]
    }

    fn file(online_mandatory: bool) -> FileToAllocate {
        FileToAllocate {
            checksum: "abc123".to_owned(),
            online_mandatory,
            ..Default::default()
        }
    }

    #[test]
    fn test_online_location_is_appended() {
        let targets = BTreeSet::from([StorageTarget::new("tape")]);
        let targets = ensure_online(&file(true), targets, &locations()).unwrap();
        assert_eq!(
            targets,
            BTreeSet::from([StorageTarget::new("tape"), StorageTarget::new("disk-a")])
        );
    }

    #[test]
    fn test_targets_untouched_when_not_required() {
        let targets = BTreeSet::from([StorageTarget::new("tape")]);
        let result = ensure_online(&file(false), targets.clone(), &locations()).unwrap();
        assert_eq!(result, targets);
    }

    #[test]
    fn test_no_online_location_is_an_error() {
        let targets = BTreeSet::from([StorageTarget::new("tape")]);
        let offline = vec![StorageLocation::new("tape", 0, false)];
        assert!(matches!(
            ensure_online(&file(true), targets, &offline),
            Err(FileRequestException::OnlineUnsatisfiable { .. })
        ));
    }
}
