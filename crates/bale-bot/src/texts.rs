//! User-facing strings and menu labels.

pub const WELCOME: &str = "👋 به ربات تبدیل خوش آمدید!\n\n\
برای استفاده از ربات، لطفاً شماره تلفن خود را به اشتراک بگذارید:";
pub const SHARE_PHONE_BUTTON: &str = "📱 ارسال شماره تلفن";
pub const START_FAILED: &str = "متأسفانه در شروع کار ربات مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";

pub const ENTER_CODE: &str = "✅ شماره شما ثبت شد.\nلطفاً کد تأیید ارسال‌شده را وارد کنید:";
pub const OTP_REQUEST_FAILED: &str =
    "متأسفانه در ارسال کد تأیید مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";
pub const INVALID_CODE: &str = "❌ کد وارد شده صحیح نیست. لطفاً دوباره تلاش کنید.";
pub const VERIFICATION_FAILED: &str =
    "متأسفانه در بررسی کد تأیید مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";

pub const MENU_CHARGE_WALLET: &str = "💰 شارژ کیف پول";
pub const MENU_ACCOUNT_STATUS: &str = "📊 وضعیت حساب";

pub const CHOOSE_AMOUNT: &str = "💰 لطفاً مبلغ مورد نظر برای شارژ کیف پول را انتخاب کنید:";
pub const CHARGE_FAILED: &str =
    "متأسفانه در پردازش درخواست شارژ مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";
pub const STATUS_FAILED: &str =
    "متأسفانه در نمایش وضعیت حساب مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";

pub const INVALID_AMOUNT: &str = "مبلغ انتخاب‌شده معتبر نیست.";
pub const PAYMENT_FAILED: &str = "متأسفانه در پردازش پرداخت مشکلی پیش آمد.";

/// Callback payload prefix of the charge-wallet buttons.
pub const PAYMENT_PREFIX: &str = "pay_";

/// Charge-wallet buttons, two per row.
pub const CHARGE_AMOUNTS: [(&str, u64); 4] = [
    ("💳 ۵۰,۰۰۰ تومان", 50_000),
    ("💳 ۱۰۰,۰۰۰ تومان", 100_000),
    ("💳 ۲۰۰,۰۰۰ تومان", 200_000),
    ("💳 ۵۰۰,۰۰۰ تومان", 500_000),
];

pub fn account_status(balance: &str) -> String {
    format!("💰 موجودی کیف پول: {balance} تومان\nاز منوی زیر انتخاب کنید:")
}
