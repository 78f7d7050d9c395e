//! Stop-term sets.
//!
//! Stop terms are explicit configuration injected into the normalizer; there
//! is no process-wide list. The built-in lists hold generic bibliometric
//! boilerplate (study design, demographics, grant-writing vocabulary) and are
//! merged with the per-language `extra_stopwords` from settings.

use std::collections::HashSet;

use evolution_types::{Language, Settings};

/// Generic Latin-script terms that carry no topical signal.
const DEFAULT_LATIN: &[&str] = &[
    "human", "humans", "male", "female", "adult", "aged", "middle aged", "young adult",
    "adolescent", "child", "children", "animals", "research", "study", "studies", "data",
    "analysis", "method", "methods", "result", "results", "outcome", "outcomes", "patient",
    "patients", "treatment", "clinical", "control", "group", "effect", "effects", "role",
    "goals", "aim", "aims", "objective", "objectives", "development", "novel", "new", "work",
    "process", "model", "system", "area", "testing", "disease", "disorder", "disorders",
    "level", "levels", "change", "changes", "measure", "measures", "performance", "time",
    "sample", "response", "task", "tasks", "intervention", "condition", "conditions",
    "function", "associated", "related", "significant", "evidence", "risk", "factor",
    "factors", "design", "support", "evaluation", "assessment", "approach", "program",
    "programs", "type", "types", "address", "specific", "identify", "understanding",
    "develop", "improved", "potential", "innovative", "innovation", "public health relevance",
    "relevance", "investigators", "researchers", "funding", "grant", "review", "report",
    "reports", "experiment", "experiments", "in vivo", "in vitro",
];

/// Generic ideographic terms (research boilerplate in CJK keyword fields).
const DEFAULT_IDEOGRAPHIC: &[&str] = &[
    "研究", "分析", "方法", "结果", "患者", "临床", "治疗", "诊断", "项目", "机制", "实验",
    "目的", "结论", "背景", "对象", "材料", "讨论", "意义", "采用", "进行", "探讨", "观察",
    "检测", "比较", "评估", "影响", "作用", "相关", "水平", "表达", "变化", "功能", "正常",
    "对照", "统计", "差异", "显著", "提示", "可能", "发现", "报告", "资料", "信息", "技术",
    "应用", "系统", "目前", "近年来", "国内外", "本研究", "本项目", "课题", "申请", "基金",
];

/// A case-insensitive set of terms excluded from keyword streams.
#[derive(Debug, Clone, Default)]
pub struct StopTerms {
    terms: HashSet<String>,
}

impl StopTerms {
    /// An empty set; nothing is filtered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from arbitrary terms.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(terms);
        set
    }

    /// The built-in list for a language.
    ///
    /// Ideographic fields routinely carry Latin fragments, so the ideographic
    /// set also includes the Latin list.
    pub fn defaults(language: Language) -> Self {
        let mut set = Self::new(DEFAULT_LATIN);
        if language == Language::Ideographic {
            set.extend(DEFAULT_IDEOGRAPHIC);
        }
        set
    }

    /// Build the effective set for a language from settings.
    pub fn for_language(language: Language, settings: &Settings) -> Self {
        let mut set = Self::empty();
        let consulted: &[Language] = match language {
            Language::Latin => &[Language::Latin],
            Language::Ideographic => &[Language::Ideographic, Language::Latin],
        };
        for lang in consulted {
            let cfg = settings.language(*lang);
            if cfg.use_default_stopwords {
                match lang {
                    Language::Latin => set.extend(DEFAULT_LATIN),
                    Language::Ideographic => set.extend(DEFAULT_IDEOGRAPHIC),
                }
            }
            set.extend(&cfg.extra_stopwords);
        }
        set
    }

    /// Add terms to the set.
    pub fn extend<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            let key = stop_key(term.as_ref());
            if !key.is_empty() {
                self.terms.insert(key);
            }
        }
    }

    /// Whether a token is a stop term.
    pub fn contains(&self, token: &str) -> bool {
        self.terms.contains(&stop_key(token))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Lower-cased, trimmed, trailing-period-stripped comparison key.
fn stop_key(term: &str) -> String {
    term.trim().to_lowercase().trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_case_insensitive() {
        let stop = StopTerms::new(["Brain", "study"]);
        assert!(stop.contains("brain"));
        assert!(stop.contains("BRAIN"));
        assert!(stop.contains("study."));
        assert!(!stop.contains("dopamine"));
    }

    #[test]
    fn test_defaults_ideographic_includes_latin() {
        let stop = StopTerms::defaults(Language::Ideographic);
        assert!(stop.contains("研究"));
        assert!(stop.contains("patients"));
        let latin = StopTerms::defaults(Language::Latin);
        assert!(!latin.contains("研究"));
    }

    #[test]
    fn test_for_language_merges_extras() {
        let mut settings = Settings::default();
        settings.latin.extra_stopwords = vec!["Schizophrenia".to_string()];
        settings.ideographic.extra_stopwords = vec!["精神分裂症".to_string()];

        let latin = StopTerms::for_language(Language::Latin, &settings);
        assert!(latin.contains("schizophrenia"));
        assert!(!latin.contains("精神分裂症"));

        let ideo = StopTerms::for_language(Language::Ideographic, &settings);
        assert!(ideo.contains("精神分裂症."));
        assert!(ideo.contains("schizophrenia"));
    }

    #[test]
    fn test_for_language_without_defaults() {
        let mut settings = Settings::default();
        settings.latin.use_default_stopwords = false;
        let latin = StopTerms::for_language(Language::Latin, &settings);
        assert!(latin.is_empty());
    }

    #[test]
    fn test_empty_terms_ignored() {
        let stop = StopTerms::new(["", "  ", "..."]);
        assert!(stop.is_empty());
    }
}
