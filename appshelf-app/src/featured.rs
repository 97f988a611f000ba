//! Hand-picked web apps shown when nothing has been saved yet.
use appshelf_common::{Icon, WebAppDescriptor};

fn app(
    name: &str,
    description: &str,
    icon: &str,
    background_color: &str,
    theme_color: &str,
    url: &str,
) -> WebAppDescriptor {
    WebAppDescriptor {
        name: Some(name.into()),
        description: Some(description.into()),
        icons: Some(Icon {
            src: icon.into(),
            sizes: Some(512),
        }),
        background_color: Some(background_color.into()),
        theme_color: Some(theme_color.into()),
        ..WebAppDescriptor::new(url)
    }
}

pub fn featured_apps() -> Vec<WebAppDescriptor> {
    vec![
        app(
            "Podle",
            "Listen to podcasts with the Podle Web App.",
            "https://podle.audio/static/icon512.png",
            "white",
            "#4E3F30",
            "https://podle.audio/",
        ),
        app(
            "The Air Horner",
            "An Air horn. Probably the best air horn web app there is.",
            "https://airhorner.com/images/touch/Airhorner_512.png",
            "#2196F3",
            "#2196F3",
            "https://airhorner.com/",
        ),
        app(
            "A-Frame Racer",
            "Speed through ruined tracks in the ocean.",
            "https://samsunginternet.github.io/a-frame-demos/racer/icon192.png",
            "white",
            "#8953D8",
            "https://samsunginternet.github.io/a-frame-demos/racer/",
        ),
    ]
}
