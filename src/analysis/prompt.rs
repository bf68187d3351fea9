use std::fmt::Write;

use crate::preferences::Preferences;

pub fn build_prompt(prefs: &Preferences, flyer_count: usize) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a thrifty home cook. {flyer_count} image(s) of supermarket sales flyers are attached."
    );
    prompt.push_str(
        "First decide whether the images really are retail sales flyers. \
         If they are not, set isFlyer to false, leave recipes empty and reply with a short, \
         friendly Kansai-style tsukkomi joke about what the image shows in the joke field.\n",
    );
    prompt.push_str(
        "If they are flyers, set isFlyer to true, list the discounted food items you can read \
         in detectedDeals, and propose exactly 3 recipes that make the most of those deals.\n",
    );
    let _ = writeln!(
        prompt,
        "Constraints: total ingredient cost per recipe within {} yen; cuisine style: {}.",
        prefs.budget,
        prefs.cuisine_label()
    );
    if !prefs.fridge_ingredients.is_empty() {
        let _ = writeln!(
            prompt,
            "The user already has these ingredients at home, use them where sensible and do not count \
             them in the cost: {}.",
            prefs.fridge_ingredients.join(", ")
        );
    }
    prompt.push_str(
        "For every recipe give title, description, cookingTimeMinutes, ingredients (name, quantity, \
         isDiscounted = whether it is on sale in the flyer), step-by-step instructions, \
         estimatedCost in yen, a savingsNote explaining what was saved, and per-serving nutrition \
         (calories in kcal; protein, fat, carbs, fiber in grams).\n",
    );
    prompt.push_str("Write all text in Japanese. Answer with JSON only.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Cuisine;

    #[test]
    fn includes_budget_cuisine_and_fridge() {
        let prefs = Preferences {
            budget: 1200,
            cuisine: Cuisine::Other,
            custom_cuisine: Some("タイ料理".into()),
            fridge_ingredients: vec!["卵".into(), "玉ねぎ".into()],
        };
        let prompt = build_prompt(&prefs, 2);
        assert!(prompt.contains("2 image(s)"));
        assert!(prompt.contains("1200 yen"));
        assert!(prompt.contains("タイ料理"));
        assert!(prompt.contains("卵, 玉ねぎ"));
    }

    #[test]
    fn omits_fridge_line_when_empty() {
        let prompt = build_prompt(&Preferences::default(), 1);
        assert!(!prompt.contains("already has"));
        assert!(prompt.contains("和食"));
    }
}
