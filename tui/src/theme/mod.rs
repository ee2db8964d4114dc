//! Theme and Colors
//!
//! The story palette: narration in green, the player's words in red, on the
//! terminal's own background.

use ratatui::style::Color;

// ============================================================================
// Story Colors
// ============================================================================

/// Narrator passages
pub const NARRATOR_GREEN: Color = Color::Rgb(120, 230, 120);

/// Player dialogue and the input line
pub const PLAYER_RED: Color = Color::Rgb(255, 110, 110);

/// Notices (undo feedback, debug dumps)
pub const NOTICE_YELLOW: Color = Color::Rgb(255, 223, 128);

// ============================================================================
// UI Colors
// ============================================================================

/// Separators, status bar and faded scroll edges
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Lighter fade step for scroll edges
pub const FADE_GRAY: Color = Color::Rgb(140, 140, 140);

/// Backend errors
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);
