//! Cache key layout

use uuid::Uuid;

/// All categories, ordered by name
pub const ALL_CATEGORIES: &str = "categories:all";

/// The five newest courses
pub const FEATURED_COURSES: &str = "courses:featured";

/// Current generation of the paginated course list
pub const COURSE_LIST_GENERATION: &str = "courses:list:generation";

const RESET_TOKEN_PREFIX: &str = "reset_token:";

const RATE_LIMIT_PREFIX: &str = "rate:limit:";

/// Course detail projection
pub fn course(id: Uuid) -> String {
    format!("course:{}", id)
}

/// One page of the unfiltered course list within a generation
pub fn course_list_page(generation: &str, page: u32, size: u32) -> String {
    format!("courses:list:gen:{}:page:{}:size:{}", generation, page, size)
}

/// Password reset grant
pub fn reset_token(token: &str) -> String {
    format!("{}{}", RESET_TOKEN_PREFIX, token)
}

/// Request counter of one client address
pub fn rate_limit(client: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, client)
}
