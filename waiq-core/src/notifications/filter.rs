//! Promotional notification heuristic
//!
//! Carrier and retail SMS campaigns flood the notification shade of the SMS
//! app. The filter only looks at messaging apps; anything else passes.
//! False negatives are expected.

/// Package identifier fragments that mark an SMS/MMS application
const MESSAGING_PACKAGE_MARKERS: &[&str] = &["messaging", "sms", "mms"];

/// Promotional terms, matched against the lowercased title and body.
///
/// Covers unsubscribe codes ("لغو11"), discount, gift, prize, top-up credit,
/// internet data packages, the three national carriers and "off".
pub const PROMOTIONAL_KEYWORDS: &[&str] = &[
    "لغو11",
    "لغو 11",
    "لغو ارسال",
    "تخفیف",
    "هدیه",
    "جایزه",
    "شارژ",
    "بسته اینترنت",
    "پکیج اینترنت",
    "همراه اول",
    "ایرانسل",
    "رایتل",
    "% تخفیف",
    "off",
];

/// Whether a package identifier looks like an SMS/MMS application
pub fn is_messaging_package(package: &str) -> bool {
    MESSAGING_PACKAGE_MARKERS
        .iter()
        .any(|marker| package.contains(marker))
}

/// Whether a notification from `package` is likely advertising
pub fn is_promotional(title: &str, body: &str, package: &str) -> bool {
    if !is_messaging_package(package) {
        return false;
    }

    let text = format!("{} {}", title, body).to_lowercase();
    PROMOTIONAL_KEYWORDS
        .iter()
        .any(|keyword| text.contains(&keyword.to_lowercase()))
}
