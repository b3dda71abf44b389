//! Page templates, compiled into the binary.

use tera::Tera;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("includes/header.html", include_str!("../templates/includes/header.html")),
    ("includes/paginator.html", include_str!("../templates/includes/paginator.html")),
    ("includes/post_card.html", include_str!("../templates/includes/post_card.html")),
    ("includes/form_errors.html", include_str!("../templates/includes/form_errors.html")),
    ("posts/index.html", include_str!("../templates/posts/index.html")),
    ("posts/group_list.html", include_str!("../templates/posts/group_list.html")),
    ("posts/profile.html", include_str!("../templates/posts/profile.html")),
    ("posts/post_detail.html", include_str!("../templates/posts/post_detail.html")),
    ("posts/create_post.html", include_str!("../templates/posts/create_post.html")),
    ("users/login.html", include_str!("../templates/users/login.html")),
    ("users/signup.html", include_str!("../templates/users/signup.html")),
    ("users/logged_out.html", include_str!("../templates/users/logged_out.html")),
    ("core/404.html", include_str!("../templates/core/404.html")),
    ("core/500.html", include_str!("../templates/core/500.html")),
];

/// Parse every template. Fails on the first syntax error.
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    tera.autoescape_on(vec![".html"]);
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_parse() {
        let tera = load().unwrap();
        for (name, _) in TEMPLATES {
            assert!(tera.get_template_names().any(|n| n == *name), "{name} missing");
        }
    }
}
