//! 诊所系统页面的地址与选择器

pub const LOGIN_PAGE: &str = "login.php";
pub const PATIENTS_PAGE: &str = "patient_list.php";
pub const CALENDAR_PAGE: &str = "calendar.php";

pub mod login {
    pub const USERNAME: &str = "#username";
    pub const PASSWORD: &str = "#password";
    pub const SUBMIT: &str = "button[type=\"submit\"]";
}

pub mod patients {
    /// 登录后导航栏中的患者列表入口
    pub const NAV_LINK: &str = "a[href='patient_list.php']";
    pub const ROWS: &str = "table#datatable tbody tr";
    pub const CELL: &str = "td";
    pub const LINK: &str = "a";
}

pub mod calendar {
    pub const NAV_LINK: &str = "a[href='calendar.php']";
    pub const DAY_VIEW_BUTTON: &str = "button.fc-agendaDay-button";
    pub const GRID: &str = "table";
    pub const HEADER: &str = ".fc-center h2";
    pub const NEXT_BUTTON: &str = "button.fc-next-button";
    pub const PREV_BUTTON: &str = "button.fc-prev-button";
    pub const EVENT: &str = ".fc-event";
    pub const MODAL: &str = ".modal-content";
    pub const MODAL_CLOSE: &str = "button.close";

    /// 日历标题的日期格式，先尝试完整月份名
    pub const HEADER_FORMATS: [&str; 2] = ["%B %d, %Y", "%b %d, %Y"];
}
