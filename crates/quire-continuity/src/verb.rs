//! Action verbs derived from milestone ids
//!
//! `shard_bind` names the verb `bind` and the object `shard`; `maps_acquired`
//! names `acquire` (already in past form) and `maps`. The last id token is
//! taken as the verb.

/// `(base, simple past, past participle)` for verbs that do not take `-ed`
const IRREGULAR: &[(&str, &str, &str)] = &[
    ("begin", "began", "begun"),
    ("bind", "bound", "bound"),
    ("break", "broke", "broken"),
    ("bring", "brought", "brought"),
    ("build", "built", "built"),
    ("buy", "bought", "bought"),
    ("catch", "caught", "caught"),
    ("choose", "chose", "chosen"),
    ("draw", "drew", "drawn"),
    ("drink", "drank", "drunk"),
    ("eat", "ate", "eaten"),
    ("fight", "fought", "fought"),
    ("find", "found", "found"),
    ("forget", "forgot", "forgotten"),
    ("get", "got", "gotten"),
    ("give", "gave", "given"),
    ("hold", "held", "held"),
    ("keep", "kept", "kept"),
    ("leave", "left", "left"),
    ("light", "lit", "lit"),
    ("lose", "lost", "lost"),
    ("make", "made", "made"),
    ("meet", "met", "met"),
    ("ride", "rode", "ridden"),
    ("seek", "sought", "sought"),
    ("sell", "sold", "sold"),
    ("speak", "spoke", "spoken"),
    ("steal", "stole", "stolen"),
    ("swear", "swore", "sworn"),
    ("take", "took", "taken"),
    ("teach", "taught", "taught"),
    ("tell", "told", "told"),
    ("wake", "woke", "woken"),
    ("win", "won", "won"),
    ("write", "wrote", "written"),
];

/// Inflected forms of one action verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbForms {
    base: String,
    completed: Vec<String>,
    present: Vec<String>,
}

impl VerbForms {
    /// Inflect a verb given in base or past form
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let token = token.to_ascii_lowercase();

        if let Some(&(base, past, participle)) = IRREGULAR
            .iter()
            .find(|(b, p, pp)| *b == token || *p == token || *pp == token)
        {
            return Self {
                base: base.to_string(),
                completed: dedup(vec![past.to_string(), participle.to_string()]),
                present: vec![third_person(base)],
            };
        }

        if let Some(stem) = token.strip_suffix("ied") {
            let base = format!("{stem}y");
            return Self {
                present: vec![third_person(&base)],
                base,
                completed: vec![token],
            };
        }

        if let Some(stem) = token.strip_suffix("ed") {
            // Either `acquire` + d or `open` + ed; both readings are kept
            let silent_e = format!("{stem}e");
            let plain = undouble(stem).to_string();
            let bases = if stem.ends_with(['r', 'v', 'z', 'c', 'g', 'u']) {
                dedup(vec![silent_e, plain])
            } else {
                dedup(vec![plain, silent_e])
            };
            return Self {
                present: bases.iter().map(|b| third_person(b)).collect(),
                base: bases[0].clone(),
                completed: vec![token],
            };
        }

        Self {
            completed: regular_past(&token),
            present: vec![third_person(&token)],
            base: token,
        }
    }

    /// Base form
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Simple past and participle forms
    #[inline]
    #[must_use]
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Every form that narrates the action happening
    #[must_use]
    pub fn enactments(&self) -> Vec<String> {
        let mut forms = self.completed.clone();
        forms.extend(self.present.iter().cloned());
        dedup(forms)
    }
}

/// Verb plus object nouns named by a milestone id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneAction {
    /// Action verb
    pub verb: VerbForms,

    /// Object nouns, singular and plural variants
    pub objects: Vec<String>,
}

impl MilestoneAction {
    /// Derive from an id like `shard_bind`
    ///
    /// Returns `None` if the id has no alphabetic token.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let tokens: Vec<&str> = id
            .split(['_', '-'])
            .filter(|t| !t.is_empty() && t.chars().any(char::is_alphabetic))
            .collect();
        let (verb, objects) = tokens.split_last()?;

        let objects = objects
            .iter()
            .flat_map(|noun| noun_variants(&noun.to_ascii_lowercase()))
            .collect();
        Some(Self {
            verb: VerbForms::from_token(verb),
            objects: dedup(objects),
        })
    }
}

fn regular_past(base: &str) -> Vec<String> {
    let chars: Vec<char> = base.chars().collect();
    let n = chars.len();
    if base.ends_with('e') {
        return vec![format!("{base}d")];
    }
    if n >= 2 && chars[n - 1] == 'y' && !is_vowel(chars[n - 2]) {
        return vec![format!("{}ied", &base[..base.len() - 1])];
    }
    let mut forms = vec![format!("{base}ed")];
    let cvc = n >= 3
        && !is_vowel(chars[n - 1])
        && is_vowel(chars[n - 2])
        && !is_vowel(chars[n - 3])
        && !matches!(chars[n - 1], 'w' | 'x' | 'y');
    let one_syllable = chars.iter().filter(|c| is_vowel(**c)).count() == 1;
    if cvc && one_syllable {
        forms.push(format!("{base}{}ed", chars[n - 1]));
    }
    forms
}

fn third_person(base: &str) -> String {
    let chars: Vec<char> = base.chars().collect();
    let n = chars.len();
    if ["s", "sh", "ch", "x", "z", "o"].iter().any(|s| base.ends_with(s)) {
        format!("{base}es")
    } else if n >= 2 && chars[n - 1] == 'y' && !is_vowel(chars[n - 2]) {
        format!("{}ies", &base[..base.len() - 1])
    } else {
        format!("{base}s")
    }
}

fn undouble(stem: &str) -> &str {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if stem.is_ascii() && n >= 2 && bytes[n - 1] == bytes[n - 2] && !is_vowel(char::from(bytes[n - 1])) {
        &stem[..n - 1]
    } else {
        stem
    }
}

fn noun_variants(noun: &str) -> Vec<String> {
    let mut out = vec![noun.to_string()];
    if noun.ends_with("ss") {
        out.push(format!("{noun}es"));
    } else if let Some(singular) = noun.strip_suffix('s').filter(|s| s.len() >= 3) {
        out.push(singular.to_string());
    } else {
        out.push(format!("{noun}s"));
    }
    out
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn dedup(mut items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    items.retain(|item| seen.insert(item.clone()));
    items
}
