//! Word lists behind the heuristic classifier.
//!
//! All entries are lowercase. Multi-word markers are matched as substrings
//! of the lowercased subject and body; single words are matched as tokens.

/// A scoring category and the status it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Application,
    Interview,
    Offer,
    Rejection,
}

impl Category {
    /// Outcome categories outweigh a plain mention of an application.
    pub fn weight(&self) -> u32 {
        match self {
            Category::Application => 1,
            Category::Interview | Category::Offer | Category::Rejection => 4,
        }
    }
}

/// Scoring order. On equal scores the earlier category wins.
pub const CATEGORIES: &[(Category, &[&str])] = &[
    (
        Category::Application,
        &[
            "application", "applications", "applied", "applying", "submit", "submitted",
            "submission", "consider", "considering", "candidacy", "job", "opening", "position",
            "role", "opportunity", "resume", "cv", "cover", "letter", "soon",
        ],
    ),
    (
        Category::Interview,
        &[
            "interview", "interviews", "interviewing", "meet", "discuss", "conversation", "call",
            "schedule", "talk", "chat", "screen", "screening", "assessment", "exam", "test",
            "assignment",
        ],
    ),
    (
        Category::Offer,
        &[
            "offer", "offered", "congratulations", "congrats", "welcome", "join", "hired",
            "contract", "compensation", "salary", "benefits", "package", "onboarding",
        ],
    ),
    (
        Category::Rejection,
        &[
            "unfortunately", "regret", "regretfully", "candidates", "sorry", "decline",
            "declined", "unsuccessful", "qualified", "decided", "pursue", "pursuing", "rejected",
        ],
    ),
];

/// Words that indicate a take-home or online test. A message asking for one
/// is still at the application stage.
pub const ASSESSMENT_WORDS: &[&str] = &[
    "assessment", "assessments", "exam", "test", "assignment", "hackerrank", "codility",
    "codesignal",
];

/// Phrases typical of job boards, alerts and newsletters. A message carrying
/// one of these is rejected unless it also has a [`PERSONAL_MARKERS`] phrase.
pub const POSTING_MARKERS: &[&str] = &[
    "job alert",
    "jobs you may be interested in",
    "recommended jobs",
    "recommended for you",
    "jobs for you",
    "new jobs",
    "job recommendations",
    "similar jobs",
    "apply now",
    "easy apply",
    "view job",
    "see all jobs",
    "career fair",
    "hiring event",
    "is hiring",
    "are hiring",
    "we're hiring",
    "handshake",
    "newsletter",
    "unsubscribe",
];

/// Phrases that address the reader about an application they made.
pub const PERSONAL_MARKERS: &[&str] = &[
    "your application",
    "thank you for applying",
    "thanks for applying",
    "thank you for your interest in",
    "you applied",
    "your candidacy",
    "we regret",
    "interview with",
    "schedule an interview",
    "schedule your interview",
    "offer letter",
    "pleased to offer",
    "pleased to extend",
    "moving forward with other",
    "not to move forward",
    "not be moving forward",
];

pub const POSITION_TITLES: &[&str] = &[
    "Software Engineer", "Data Scientist", "Machine Learning Engineer",
    "Web Developer", "Mobile App Developer", "Systems Analyst",
    "Database Administrator", "Cloud Engineer", "DevOps Engineer",
    "Cybersecurity Analyst", "Full Stack Developer", "Frontend Developer",
    "Backend Developer", "UI/UX Designer", "Network Engineer",
    "AI Engineer", "Business Intelligence Analyst", "Game Developer",
    "Embedded Systems Engineer", "Data Engineer", "IT Support Specialist",
    "Technical Project Manager", "QA Engineer", "Quality Assurance Engineer",
    "Site Reliability Engineer", "Software Architect", "Solutions Architect",
    "Product Manager", "Scrum Master", "Agile Coach", "Data Analyst",
    "Business Analyst", "Systems Administrator", "Network Administrator",
    "Information Security Analyst", "Cloud Architect", "Big Data Engineer",
    "Blockchain Developer", "IoT Developer", "AR/VR Developer",
    "Technical Writer", "IT Consultant", "Technology Consultant",
];

/// Legal-entity and corporate suffixes, lowercase, without trailing dots.
pub const COMPANY_SUFFIXES: &[&str] = &[
    "inc", "incorporated", "llc", "ltd", "limited", "corp", "corporation", "co", "company",
    "gmbh", "ag", "sa", "nv", "plc", "group", "holdings", "ventures", "technologies", "labs",
];

/// Capitalized words that are never part of a company name.
pub const NON_NAME_WORDS: &[&str] = &[
    "dear", "hi", "hello", "hey", "thanks", "thank", "best", "regards", "sincerely", "cheers",
    "warm", "kind", "team", "recruiting", "recruiter", "talent", "acquisition", "hr", "human",
    "resources", "careers", "career", "hiring", "jobs", "status", "update", "re", "fwd", "fw",
    "email", "subject", "body", "please", "note", "reminder", "action", "required", "next",
    "steps", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "january", "february", "march", "april", "june", "july", "august", "september", "october",
    "november", "december", "today", "tomorrow", "yes", "ok", "unknown", "us", "usa",
];

/// English stopwords, sorted for binary search.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "couldn", "couldn't", "d", "did", "didn", "didn't",
    "do", "does", "doesn", "doesn't", "doing", "don", "don't", "down", "during", "each", "few",
    "for", "from", "further", "had", "hadn", "hadn't", "has", "hasn", "hasn't", "have",
    "haven", "haven't", "having", "he", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "i", "if", "in", "into", "is", "isn", "isn't", "it", "it's", "its", "itself",
    "just", "ll", "m", "ma", "me", "mightn", "mightn't", "more", "most", "mustn", "mustn't",
    "my", "myself", "needn", "needn't", "no", "nor", "not", "now", "o", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "re", "s",
    "same", "shan", "shan't", "she", "she's", "should", "should've", "shouldn", "shouldn't",
    "so", "some", "such", "t", "than", "that", "that'll", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "ve", "very", "was", "wasn", "wasn't", "we", "were", "weren",
    "weren't", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "won", "won't", "wouldn", "wouldn't", "y", "you", "you'd", "you'll", "you're", "you've",
    "your", "yours", "yourself", "yourselves",
];
