//! Built-in posts used to seed an empty store when no remote is usable.

use crate::db::NewBlog;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

struct MockBlog {
  id: &'static str,
  title: &'static str,
  content: &'static str,
  author: &'static str,
  author_email: &'static str,
  days_ago: i64,
  excerpt: &'static str,
}

const MOCK_BLOGS: [MockBlog; 8] = [
  MockBlog {
    id: "1",
    title: "Bem-vindo ao Mundo React Native",
    content: "React Native é uma das tecnologias mais empolgantes para desenvolvimento mobile atualmente.\n\n\
      Nos últimos anos, a comunidade tem crescido exponencialmente, e as ferramentas disponíveis tornaram o desenvolvimento ainda mais produtivo.\n\n\
      Neste post, vamos explorar os fundamentos do React Native e como você pode começar a criar apps incríveis já hoje.",
    author: "Maria Silva",
    author_email: "maria@exemplo.com",
    days_ago: 7,
    excerpt: "Uma introdução completa ao React Native para iniciantes",
  },
  MockBlog {
    id: "2",
    title: "Offline-First: O Futuro dos Apps Mobile",
    content: "Apps offline-first não são mais uma tendência - são uma necessidade.\n\n\
      Hoje, usuários esperam que apps funcionem perfeitamente mesmo sem conexão com a internet. WatermelonDB é uma das soluções mais elegantes para criar apps verdadeiramente offline-first.\n\n\
      Vamos mergulhar em como implementar sincronização robusta e garantir a melhor experiência possível para seus usuários, mesmo em ambientes com conectividade limitada.",
    author: "João Santos",
    author_email: "joao@exemplo.com",
    days_ago: 5,
    excerpt: "Como criar apps que funcionam offline perfeitamente",
  },
  MockBlog {
    id: "3",
    title: "WatermelonDB vs SQLite: Comparação Prática",
    content: "Quando se trata de persistência local em React Native, desenvolvedores frequentemente se perguntam: WatermelonDB ou SQLite direto?\n\n\
      Ambos têm seus prós e contras. SQLite oferece máximo controle e performance, enquanto WatermelonDB traz observability reativa e abstrações poderosas.\n\n\
      Vamos analisar casos de uso reais e quando cada abordagem faz mais sentido.",
    author: "Ana Costa",
    author_email: "ana@exemplo.com",
    days_ago: 3,
    excerpt: "Análise detalhada de soluções de persistência local",
  },
  MockBlog {
    id: "4",
    title: "Supabase + React Native: Backend Sem Esforço",
    content: "Supabase está revolucionando como desenvolvedores constroem backends para apps mobile.\n\n\
      Com APIs auto-geradas, auth integrado, e real-time subscriptions, Supabase elimina a necessidade de criar e manter servidores complexos.\n\n\
      Neste guia, vamos configurar Supabase em um app React Native e ver como integrar com WatermelonDB para sincronização bidirecional.",
    author: "Pedro Oliveira",
    author_email: "pedro@exemplo.com",
    days_ago: 2,
    excerpt: "Configure um backend completo em minutos",
  },
  MockBlog {
    id: "5",
    title: "TypeScript em React Native: Por Onde Começar",
    content: "TypeScript não é mais opcional no desenvolvimento React Native moderno.\n\n\
      Type safety, IntelliSense melhorado, e documentação auto-gerada tornam TypeScript uma escolha óbvia para projetos sérios.\n\n\
      Mas configurar TypeScript corretamente no React Native pode ser desafiador. Vamos ver as melhores práticas e configurações recomendadas.",
    author: "Camila Lima",
    author_email: "camila@exemplo.com",
    days_ago: 1,
    excerpt: "Configure TypeScript no seu app React Native",
  },
  MockBlog {
    id: "6",
    title: "Estados Globais com Context API",
    content: "Context API é poderosa, mas usá-la para estados globais complexos pode levar a problemas de performance.\n\n\
      Vamos discutir quando usar Context, quando usar soluções como Redux ou Zustand, e como estruturar estados globais de forma eficiente.\n\n\
      Boas práticas e armadilhas comuns serão cobertas neste post.",
    author: "Ricardo Silva",
    author_email: "ricardo@exemplo.com",
    days_ago: 4,
    excerpt: "Gerencie estados globais de forma eficiente",
  },
  MockBlog {
    id: "7",
    title: "Testing em React Native: Guia Completo",
    content: "Testing é crucial para manter qualidade em apps mobile.\n\n\
      React Native oferece várias ferramentas: Jest, React Native Testing Library, Detox para E2E, e muito mais.\n\n\
      Vamos construir uma estratégia de testes abrangente e ver exemplos práticos de unit, integration e E2E tests.",
    author: "Fernanda Rocha",
    author_email: "fernanda@exemplo.com",
    days_ago: 6,
    excerpt: "Estratégia completa de testes para React Native",
  },
  MockBlog {
    id: "8",
    title: "Deploy e CI/CD para React Native",
    content: "Publicar apps para App Store e Google Play manualmente é um pesadelo.\n\n\
      Com pipelines CI/CD adequados, você pode automatizar builds, testes, e deploys para ambos os stores.\n\n\
      Vamos configurar GitHub Actions para automatizar todo o processo de release.",
    author: "Carlos Mendes",
    author_email: "carlos@exemplo.com",
    days_ago: 10,
    excerpt: "Automatize seus deploys com GitHub Actions",
  },
];

/// The fallback posts in declared order, published relative to `now_ms`.
pub fn mock_blogs(now_ms: i64) -> Vec<NewBlog> {
  MOCK_BLOGS
    .iter()
    .map(|m| NewBlog {
      id: m.id.to_string(),
      title: m.title.to_string(),
      content: m.content.to_string(),
      author: m.author.to_string(),
      author_email: m.author_email.to_string(),
      published_at: now_ms - m.days_ago * DAY_MS,
      excerpt: Some(m.excerpt.to_string()),
      cover_image: None,
    })
    .collect()
}
