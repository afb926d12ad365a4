//! Server-rendered pages.

const STYLE: &str = r"
body{font-family:system-ui,sans-serif;margin:0;background:#f4f4f7;color:#222}
.card{max-width:32rem;margin:4rem auto;padding:2rem;background:#fff;border-radius:8px;box-shadow:0 2px 8px rgba(0,0,0,.08)}
h1{margin-top:0}
form .row{margin-bottom:1rem}
label{display:block;margin-bottom:.25rem}
input[type=text],input[type=password]{width:100%;padding:.5rem;box-sizing:border-box}
.btn{display:inline-block;padding:.5rem 1rem;border:0;border-radius:4px;background:#333;color:#fff;text-decoration:none;cursor:pointer}
.btn-light{background:#e7e7ea;color:#222}
.btn-google{background:#db4437}
.secret{padding:.75rem 0;border-bottom:1px solid #eee;font-size:1.1rem}
";

/// Escape text for HTML element and attribute contexts.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head><body>
<div class="card">
{body}
</div>
</body></html>"#,
        title = escape(title),
    )
}

fn credentials_form(action: &str, submit_label: &str, csrf_token: &str) -> String {
    format!(
        r#"<form method="POST" action="{action}">
  <input type="hidden" name="_csrf" value="{csrf}">
  <div class="row">
    <label for="username">Username</label>
    <input type="text" id="username" name="username" required autocomplete="username">
  </div>
  <div class="row">
    <label for="password">Password</label>
    <input type="password" id="password" name="password" required>
  </div>
  <button type="submit" class="btn">{submit_label}</button>
</form>
<p><a class="btn btn-google" href="/auth/google">Sign in with Google</a></p>"#,
        csrf = escape(csrf_token),
    )
}

#[must_use]
pub fn home() -> String {
    layout(
        "Secrets",
        r#"<h1>Secrets</h1>
<p>Don't keep your secrets, share them anonymously!</p>
<a class="btn btn-light" href="/register">Register</a>
<a class="btn" href="/login">Login</a>"#,
    )
}

#[must_use]
pub fn login(csrf_token: &str) -> String {
    let form = credentials_form("/login", "Login", csrf_token);
    layout("Login", &format!("<h1>Login</h1>\n{form}"))
}

#[must_use]
pub fn register(csrf_token: &str) -> String {
    let form = credentials_form("/register", "Register", csrf_token);
    layout("Register", &format!("<h1>Register</h1>\n{form}"))
}

#[must_use]
pub fn secrets(secrets: &[String], authenticated: bool) -> String {
    let items: String = secrets
        .iter()
        .map(|secret| format!("<p class=\"secret\">{}</p>\n", escape(secret)))
        .collect();
    let actions = if authenticated {
        r#"<a class="btn btn-light" href="/logout">Log Out</a>
<a class="btn" href="/submit">Submit a Secret</a>"#
    } else {
        r#"<a class="btn btn-light" href="/login">Login</a>
<a class="btn" href="/register">Register</a>"#
    };
    layout(
        "Secrets",
        &format!("<h1>You've Discovered My Secret!</h1>\n{items}<hr>\n{actions}"),
    )
}

#[must_use]
pub fn submit(csrf_token: &str) -> String {
    layout(
        "Submit a Secret",
        &format!(
            r#"<h1>Secrets</h1>
<p>Don't keep your secrets, share them anonymously!</p>
<form method="POST" action="/submit">
  <input type="hidden" name="_csrf" value="{csrf}">
  <div class="row">
    <input type="text" name="secret" placeholder="What's your secret?" required>
  </div>
  <button type="submit" class="btn">Submit</button>
</form>"#,
            csrf = escape(csrf_token),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn secrets_page_escapes_every_entry() {
        let page = secrets(&["<b>bold</b>".to_string(), "hello".to_string()], false);
        assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(page.contains(">hello</p>"));
        assert!(!page.contains("<b>bold</b>"));
    }

    #[test]
    fn secrets_page_offers_submit_only_when_signed_in() {
        assert!(secrets(&[], true).contains("/submit"));
        assert!(!secrets(&[], false).contains("/submit"));
    }

    #[test]
    fn forms_embed_csrf_token() {
        assert!(login("tok-1").contains(r#"name="_csrf" value="tok-1""#));
        assert!(register("tok-2").contains(r#"action="/register""#));
        assert!(submit("tok-3").contains(r#"name="secret""#));
    }
}
