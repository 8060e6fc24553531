use socops_core::{Channel, Pillar, PostBrief};

/// Generation settings for one `(pillar, channel)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTemplate {
    pub format: &'static str,
    pub tone: &'static str,
    pub max_length: usize,
    pub temperature: f32,
    pub instructions: &'static str,
}

#[must_use]
pub fn template_for(pillar: Pillar, channel: Channel) -> ChannelTemplate {
    match (channel, pillar) {
        (Channel::Instagram, Pillar::Catalogue) => ChannelTemplate {
            format: "carrousel",
            tone: "enthousiaste",
            max_length: 600,
            temperature: 0.7,
            instructions: "Présente la gamme en 3 à 5 slides, une caractéristique par slide.",
        },
        (Channel::Instagram, Pillar::Conseil) => ChannelTemplate {
            format: "reel",
            tone: "pédagogue",
            max_length: 500,
            temperature: 0.6,
            instructions: "Une astuce concrète, formulée comme un pas-à-pas court.",
        },
        (Channel::Instagram, Pillar::Confiance) => ChannelTemplate {
            format: "post",
            tone: "chaleureux",
            max_length: 450,
            temperature: 0.6,
            instructions: "Mets en avant un engagement de service vérifiable.",
        },
        (Channel::Instagram, Pillar::Promo) => ChannelTemplate {
            format: "story",
            tone: "dynamique",
            max_length: 300,
            temperature: 0.7,
            instructions: "Annonce l'offre dès la première ligne, avec sa durée.",
        },
        (Channel::Facebook, Pillar::Conseil) => ChannelTemplate {
            format: "post",
            tone: "pédagogue",
            max_length: 1_200,
            temperature: 0.6,
            instructions: "Explique le pourquoi et le comment, en paragraphes courts.",
        },
        (Channel::Facebook, Pillar::Promo) => ChannelTemplate {
            format: "post",
            tone: "dynamique",
            max_length: 600,
            temperature: 0.7,
            instructions: "Donne le prix et la date de fin de l'offre.",
        },
        (Channel::Facebook, Pillar::Catalogue | Pillar::Confiance) => ChannelTemplate {
            format: "post",
            tone: "rassurant",
            max_length: 800,
            temperature: 0.6,
            instructions: "Ton conversationnel, une question finale pour engager.",
        },
        (Channel::Youtube, Pillar::Conseil) => ChannelTemplate {
            format: "short",
            tone: "pédagogue",
            max_length: 1_000,
            temperature: 0.5,
            instructions: "Fournis un titre accrocheur et une description avec les étapes.",
        },
        (Channel::Youtube, _) => ChannelTemplate {
            format: "short",
            tone: "informatif",
            max_length: 800,
            temperature: 0.5,
            instructions: "Fournis un titre et une description orientée recherche.",
        },
    }
}

/// French prompt asking the provider for a JSON object.
#[must_use]
pub fn render_prompt(
    template: &ChannelTemplate,
    channel: Channel,
    brief: &PostBrief,
    link: &str,
    guidelines: &[String],
) -> String {
    let mut prompt = format!(
        "Rédige une publication {channel} au format {format} pour un site de pièces auto.\n\
         Angle : {angle}\n\
         Appel à l'action : {cta}\n\
         Lien : {link}\n\
         {instructions}\n",
        format = template.format,
        angle = brief.angle,
        cta = brief.cta_type.phrase(),
        instructions = template.instructions,
    );
    if let Some(topic) = &brief.topic {
        prompt.push_str(&format!("Sujet : {topic}\n"));
    }
    if !brief.selling_points.is_empty() {
        prompt.push_str(&format!("Arguments : {}\n", brief.selling_points.join(" ; ")));
    }
    for note in guidelines {
        prompt.push_str(&format!("Consigne : {note}\n"));
    }
    prompt.push_str(
        "Réponds uniquement en JSON avec les clés caption, hashtags, format, visual_brief, cta",
    );
    if channel == Channel::Youtube {
        prompt.push_str(", title");
    }
    prompt.push('.');
    prompt
}
