// -
// Coordination-service layout, relative to the configured root

pub const ANNOUNCEMENTS_PATH: &str = "announcements";
pub const SEGMENTS_PATH: &str = "segments";
pub const DISCOVERY_PATH: &str = "discovery";
