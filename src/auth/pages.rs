//! Server-rendered form pages. Plain markup, no template engine.

use axum::response::Html;

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>"
    ))
}

pub fn home(login_name: Option<&str>) -> Html<String> {
    let body = match login_name {
        Some(name) => format!(
            "<h1>Home</h1>\n<p>Signed in as {name}.</p>\n<p><a href=\"/logout\">Log out</a></p>"
        ),
        None => concat!(
            "<h1>Home</h1>\n",
            "<p><a href=\"/login\">Log in</a> or <a href=\"/register\">register</a>.</p>"
        )
        .to_string(),
    };
    layout("Home", &body)
}

pub fn register_form() -> Html<String> {
    layout(
        "Register",
        concat!(
            "<h1>Register</h1>\n",
            "<form method=\"post\" action=\"/register\">\n",
            "<label>Username <input name=\"login_name\" required></label>\n",
            "<label>Password <input name=\"password\" type=\"password\" required></label>\n",
            "<label>Phone Number <input name=\"phone_number\" required></label>\n",
            "<button type=\"submit\">Submit</button>\n",
            "</form>"
        ),
    )
}

pub fn login_form() -> Html<String> {
    layout(
        "Login",
        concat!(
            "<h1>Login</h1>\n",
            "<form method=\"post\" action=\"/login\">\n",
            "<label>Phone Number <input name=\"phone_number\" required></label>\n",
            "<button type=\"submit\">Submit</button>\n",
            "</form>"
        ),
    )
}

pub fn verify_form() -> Html<String> {
    layout(
        "Verify",
        concat!(
            "<h1>Verify</h1>\n",
            "<p>Enter the code we sent to your phone.</p>\n",
            "<form method=\"post\" action=\"/verify\">\n",
            "<label>Verification Code <input name=\"verification_code\" required></label>\n",
            "<button type=\"submit\">Submit</button>\n",
            "</form>"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_greets_signed_in_user() {
        let Html(page) = home(Some("alice"));
        assert!(page.contains("alice"));
        assert!(page.contains("/logout"));
    }

    #[test]
    fn forms_post_to_their_own_route() {
        let Html(register) = register_form();
        assert!(register.contains("action=\"/register\""));
        assert!(register.contains("name=\"login_name\""));

        let Html(verify) = verify_form();
        assert!(verify.contains("action=\"/verify\""));
        assert!(verify.contains("name=\"verification_code\""));
    }
}
