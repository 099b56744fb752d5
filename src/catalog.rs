pub type SceneId = u32;

pub const APP_TITLE: &str = "Menstrual Aid";
pub const APP_TAGLINE: &str = "Rural Women's Health Series";
pub const SERIES_TITLE: &str = "Understanding Periods";
pub const WELCOME_TEXT: &str = "Welcome. This is a safe space for adolescent girls and women to learn \
about their bodies, menstrual health, and self-care in a simple, respectful way.";
pub const FOOTER_TEXT: &str = "Empowering Women's Health · Designed for healthy communities.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTip {
    pub title: &'static str,
    pub body: &'static str,
}

pub const HEALTH_TIPS: &[HealthTip] = &[
    HealthTip {
        title: "Track Your Cycle",
        body: "Keeping a record of when your period starts and ends helps you understand your body's rhythm.",
    },
    HealthTip {
        title: "Eat Healthy",
        body: "Foods rich in iron like spinach and lentils help you stay strong during your period.",
    },
    HealthTip {
        title: "Need Help?",
        body: "If you feel very unwell, visit your local ASHA worker or health center. You are not alone.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Narrative,
    Diagram,
    Educational,
}

impl SceneKind {
    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Narrative => "Story",
            SceneKind::Diagram => "Diagram",
            SceneKind::Educational => "Lesson",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scene {
    pub id: SceneId,
    pub title: &'static str,
    pub description: &'static str,
    pub voiceover: &'static str,
    pub visual_prompt: &'static str,
    pub kind: SceneKind,
}

pub fn index_of(catalog: &[Scene], id: SceneId) -> Option<usize> {
    catalog.iter().position(|s| s.id == id)
}

pub const SCENES: &[Scene] = &[
    Scene {
        id: 1,
        title: "Introduction",
        description: "Mother and daughter in a village home.",
        voiceover: "Menstruation, or periods, is a natural process. It means a girl's body is healthy and growing.",
        visual_prompt: "Soft 2D digital illustration of a young Indian girl and her mother sitting in a cozy, simple rural village home. Warm sunlight through a window, friendly expressions, calm terracotta and beige colors, respectful and educational style.",
        kind: SceneKind::Narrative,
    },
    Scene {
        id: 2,
        title: "What is Menstruation",
        description: "Simple uterus diagram and changing calendar.",
        voiceover: "Every month, the body prepares for pregnancy. When it does not happen, blood flows from the vagina. This is called a period. It usually lasts 3 to 7 days.",
        visual_prompt: "A very simple, non-graphic, respectful medical diagram of a uterus in soft pink tones. Beside it, a paper calendar with pages flipping to show the passing of time. 2D flat animation style.",
        kind: SceneKind::Diagram,
    },
    Scene {
        id: 3,
        title: "What is Normal",
        description: "Girl going to school.",
        voiceover: "Periods may come every 21 to 35 days. Mild pain, backache, or mood changes are common.",
        visual_prompt: "A young Indian girl walking happily towards a village school, wearing a simple uniform. She looks slightly tired but smiling. Soft green landscape background, 2D friendly animation.",
        kind: SceneKind::Narrative,
    },
    Scene {
        id: 4,
        title: "Menstrual Hygiene",
        description: "Hygiene products and disposal.",
        voiceover: "Change pads every 4 to 6 hours. Wash hands before and after. Keep the private area clean and dry.",
        visual_prompt: "Educational illustration showing a clean sanitary pad, a clean cloth pad, a bar of soap, and a bucket of clean water. Simple symbols for hand washing. Soft pastel blue and white background.",
        kind: SceneKind::Educational,
    },
    Scene {
        id: 5,
        title: "Do's for Self Care",
        description: "Healthy habits.",
        voiceover: "Drink water. Eat healthy food. Take rest. Track your cycle.",
        visual_prompt: "A split screen showing a girl drinking water, a plate of fresh vegetables and iron-rich lentils, and a girl resting on a comfortable mat. Gentle walking in a garden. Bright, healthy colors.",
        kind: SceneKind::Educational,
    },
    Scene {
        id: 6,
        title: "Don'ts",
        description: "Myths and bad practices.",
        voiceover: "Do not use dirty cloth. Do not stay in wet pads. Do not feel ashamed. Periods are natural.",
        visual_prompt: "A respectful illustration with gentle red 'X' marks over a dirty torn cloth and a representation of hiding in shame. The girl then looks up and smiles. 'Natural' written in soft letters.",
        kind: SceneKind::Educational,
    },
    Scene {
        id: 7,
        title: "Pain Management",
        description: "Comfort and relief.",
        voiceover: "Warm compress, light exercise, and rest can reduce pain.",
        visual_prompt: "A mother comforting her daughter, handing her a warm water bottle. The daughter is doing light stretching exercises. Soft, nurturing atmosphere.",
        kind: SceneKind::Narrative,
    },
    Scene {
        id: 8,
        title: "Warning Signs",
        description: "When to see a doctor.",
        voiceover: "See a health worker if bleeding is very heavy, lasts more than 7 days, severe pain, dizziness, or missed periods.",
        visual_prompt: "A village health center with a friendly ASHA health worker wearing a green sari talking to a woman. Clear icons for warning signs: heavy flow, dizziness. Educational and safe.",
        kind: SceneKind::Diagram,
    },
    Scene {
        id: 9,
        title: "Emotional Support",
        description: "Talking to friends.",
        voiceover: "It is normal to feel emotional. Talk to someone you trust.",
        visual_prompt: "Two young Indian girls sitting under a large Banyan tree in a village, talking and laughing together. One has her hand on the other's shoulder. Soft sunset colors.",
        kind: SceneKind::Narrative,
    },
    Scene {
        id: 10,
        title: "Closing",
        description: "Confidence and Health.",
        voiceover: "Menstruation is a sign of health. Care for your body. You are not alone. Menstrual health is self-care.",
        visual_prompt: "The young girl from the beginning, now looking confident and healthy, walking with a bag towards a group of people. Text overlay: 'Menstrual health is self-care.' Soft, inspiring finale.",
        kind: SceneKind::Narrative,
    },
];
