//! System/human instruction pairs for the three text-generation steps.

pub const CHARACTER_SYSTEM: &str = "You are an assistant that generates a detailed description related to a query about the main character.";

pub const PLOT_SYSTEM: &str = "You are an assistant that generates a detailed plot description.";

pub const IMAGE_PROMPT_SYSTEM: &str = "You are an assistant that generates detailed prompts.";

pub fn character_prompt(query: &str) -> String {
    format!(
        "Based on the query: {}, create a detailed description of the main character, object, or scene. \
        Include specific details about appearance, characteristics, and any unique features. \
        The description should be detailed enough for image generation.",
        query
    )
}

pub fn plot_prompt(query: &str, character_description: &str) -> String {
    format!(
        "Based on the query: {} and featuring this description: {}, create a detailed description \
        of a single scene for an image. Include appearance, setting, atmosphere, and any unique features.",
        query, character_description
    )
}

pub fn image_prompt(plot: &str, character_description: &str) -> String {
    format!(
        "Based on the plot: {} and featuring this description: {}, generate a detailed \
        family-friendly prompt suitable for an image generation model.",
        plot, character_description
    )
}
