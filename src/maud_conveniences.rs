use crate::data::user::User;
use maud::{Markup, Render, html};

pub fn render_table<const N: usize>(
    overall_title: &'static str,
    titles: [&'static str; N],
    items: Vec<[Markup; N]>,
) -> Markup {
    html! {
        div class="container mx-auto" {
            (title(overall_title))
            div class="overflow-x-auto" {
                table class="min-w-full bg-gray-800 rounded shadow-md" {
                    thead class="bg-gray-700" {
                        tr {
                            @for title in titles {
                                th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                            }
                        }
                    }
                    tbody {
                        @for row in items {
                            tr {
                                @for col in row {
                                    td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn supertitle(s: impl Render) -> Markup {
    html! {
        h1 class="text-3xl font-bold mb-6 text-center" {(s)}
    }
}

pub fn subtitle(s: impl Render) -> Markup {
    html! {
        h2 class="text-xl font-semibold mb-2 text-gray-300" {(s)}
    }
}

pub fn render_nav(user: Option<&User>) -> Markup {
    html! {
        nav class="w-full bg-gray-800 shadow-md px-6 py-3 flex flex-row items-center justify-between" {
            div class="flex flex-row space-x-4 items-center" {
                a href="/" class="font-bold text-lg" {"Satchel"}
                a href="/students/list/" class="text-gray-300 hover:text-white" {"Students"}
                @if user.is_some() {
                    a href="/students/create/" class="text-gray-300 hover:text-white" {"Add Student"}
                }
            }
            div class="flex flex-row space-x-4 items-center" {
                @if let Some(user) = user {
                    a href="/profile" class="text-gray-300 hover:text-white" {(user.display_name)}
                    form method="post" action="/logout" {
                        button type="submit" class="bg-slate-600 hover:bg-slate-800 py-1 px-3 rounded" {"Logout"}
                    }
                } @else {
                    a href="/login" class="bg-slate-600 hover:bg-slate-800 py-1 px-3 rounded" {"Login"}
                }
            }
        }
    }
}

pub fn flash_list(flashes: &[String]) -> Markup {
    html! {
        @for flash in flashes {
            div class="bg-green-100 border border-green-400 text-green-800 px-4 py-3 rounded mb-4 w-full" role="status" {
                (flash)
            }
        }
    }
}

pub fn simple_form_element(
    id: &'static str,
    label: &'static str,
    required: bool,
    input_type: Option<&'static str>,
    value: Option<&str>,
) -> Markup {
    html! {
        div class="mb-4" {
            label for=(id) class="block text-sm font-bold mb-2 text-gray-300" {(label)}
            input type=(input_type.unwrap_or("text")) id=(id) name=(id) required[required] value=[value]
                class="shadow appearance-none border rounded w-full py-2 px-3 bg-gray-700 text-gray-200 leading-tight focus:outline-none focus:shadow-outline" {}
        }
    }
}

pub fn form_submit_button(text: Option<&str>) -> Markup {
    html! {
        button type="submit" class="bg-blue-600 hover:bg-blue-800 text-white font-bold py-2 px-4 rounded focus:outline-none focus:shadow-outline" {
            (text.unwrap_or("Submit"))
        }
    }
}

pub fn errors_list<'a>(title: Option<&str>, errors: impl Iterator<Item = &'a str>) -> Markup {
    html! {
        div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" {
            strong class="font-bold" {(title.unwrap_or("Please fix the following:"))}
            ul class="list-disc list-inside" {
                @for error in errors {
                    li {(error)}
                }
            }
        }
    }
}
