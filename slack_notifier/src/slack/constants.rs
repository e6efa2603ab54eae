pub const SLACK_API_URL: &str = "https://slack.com/api";

pub const POST_MESSAGE_PATH: &str = "/chat.postMessage";
pub const SCHEDULE_MESSAGE_PATH: &str = "/chat.scheduleMessage";
pub const DELETE_SCHEDULED_MESSAGE_PATH: &str = "/chat.deleteScheduledMessage";
pub const LIST_SCHEDULED_MESSAGES_PATH: &str = "/chat.scheduledMessages.list";
pub const AUTH_TEST_PATH: &str = "/auth.test";

/// Slack truncates longer `text` values.
pub const MAX_TEXT_LEN: usize = 40_000;
pub const MAX_BLOCKS: usize = 50;
pub const MAX_ATTACHMENTS: usize = 100;
/// `chat.scheduleMessage` refuses timestamps further out than this.
pub const MAX_SCHEDULE_DAYS: i64 = 120;

/// `ok: false` error codes that Slack documents as transient.
pub const TRANSIENT_API_ERRORS: [&str; 5] = [
    "ratelimited",
    "internal_error",
    "fatal_error",
    "service_unavailable",
    "request_timeout",
];

pub const MANAGER_QUEUE_CAPACITY: usize = 1000;
