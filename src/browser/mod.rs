pub mod driver;
pub mod page;
pub mod webdriver;

pub use driver::create_webdriver_client;
pub use page::{DownloadedFile, FrameHandle, PageError, PortalPage, Sel};
pub use webdriver::WebDriverPage;
