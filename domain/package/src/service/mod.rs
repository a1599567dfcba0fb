mod lifecycle;

#[rustfmt::skip]
pub use {
    lifecycle::PackageLifecycleService,
};
