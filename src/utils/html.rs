use ammonia;

/// Clean user-authored text using the ammonia library.
///
/// Quiz titles, descriptions, question text and option labels are all
/// instructor-supplied and are echoed back to students, so they go through
/// whitelist-based sanitization before storage: safe tags (like <b>, <p>)
/// survive, dangerous tags (like <script>, <iframe>) and attributes (like
/// onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
