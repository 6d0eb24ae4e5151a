mod envelope;
mod features_builder;
mod firmware_range;
mod firmware_version;
