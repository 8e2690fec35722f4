//! Browser automation over the W3C WebDriver HTTP protocol.
//!
//! Works with any conforming driver (chromedriver, geckodriver). Each
//! [`WebDriverLauncher::launch`] call opens a brand new browser session.

pub mod webdriver;

pub use webdriver::*;
